mod journal_entry;
mod plant;
mod task_log;
mod task_template;

pub use journal_entry::{EntryType, JournalEntry, JOURNAL_MEDIA_DIR};
pub use plant::{Plant, PLANT_MEDIA_DIR};
pub use task_log::TaskLog;
pub use task_template::{TaskTemplate, TaskType};
