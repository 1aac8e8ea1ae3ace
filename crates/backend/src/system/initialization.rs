use anyhow::Result;
use contracts::system::auth::ActorRole;
use contracts::system::users::CreateUserDto;

use crate::system::users::{repository, service};

/// Ensure admin user exists (create if table is empty)
pub async fn ensure_admin_user_exists() -> Result<()> {
    let count = repository::count_users().await?;
    if count > 0 {
        return Ok(());
    }

    tracing::info!("No users found. Creating default admin user...");

    let admin_dto = CreateUserDto {
        username: "admin".to_string(),
        password: "admin".to_string(),
        full_name: Some("Administrator".to_string()),
        role: ActorRole::Admin,
    };

    let admin_id = service::create(admin_dto, None).await?;

    tracing::warn!("Default admin user created (id {})", admin_id);
    tracing::warn!("Username: admin, password: admin. Change the password after first login");

    Ok(())
}
