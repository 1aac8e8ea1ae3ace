pub mod d001_customer_kpi;
