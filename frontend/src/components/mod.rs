pub mod activity_log;
pub mod cat_widget;
pub mod nickname_badge;

pub use activity_log::ActivityLog;
pub use cat_widget::CatWidget;
pub use nickname_badge::NicknameBadge;
