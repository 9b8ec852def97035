pub mod reference;
pub mod stock_symbol;

pub use reference::{load_reference_table, load_reference_table_from_path};
pub use stock_symbol::{primary_table, TickerTable};
