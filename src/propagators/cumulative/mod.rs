mod time_table;

pub use time_table::Task;
pub use time_table::TimeTablePropagator;
