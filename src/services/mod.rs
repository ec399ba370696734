pub mod cascade;
pub mod context;
pub mod cycles_service;
pub mod progress_service;
pub mod respondents_service;
pub mod responses_service;

pub use cascade::{CascadeDispatcher, CascadeEvaluator, CascadeOutcome};
pub use cycles_service::CyclesService;
pub use progress_service::ProgressService;
pub use respondents_service::RespondentsService;
pub use responses_service::ResponsesService;
