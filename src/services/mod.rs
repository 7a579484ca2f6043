pub mod downloads;
pub mod gateway;
pub mod lifecycle;
pub mod notifier;
pub mod renderer;
pub mod scheduler;

pub use gateway::{HttpGateway, MessageGateway};
pub use lifecycle::{DeleteOutcome, EngineEvent, LifecycleEngine, RevealOutcome};
pub use notifier::{compute_stats, Notice, NoticeLevel, Notifier};
pub use renderer::{render, Rendering};
pub use scheduler::{Countdown, CountdownScheduler, SchedulerEvent};
