/// Корень агрегата CRM: идентификатор и имена для таблиц и сообщений
pub trait AggregateRoot {
    type Id;

    fn id(&self) -> Self::Id;

    /// Индекс агрегата в системе (например, "a001")
    fn aggregate_index() -> &'static str;

    /// Имя коллекции (например, "customer")
    fn collection_name() -> &'static str;

    /// Имя элемента для сообщений (например, "Customer")
    fn element_name() -> &'static str;

    /// Имя таблицы: "a001_customer"
    fn full_name() -> String {
        format!("{}_{}", Self::aggregate_index(), Self::collection_name())
    }
}
