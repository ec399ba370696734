pub mod cycles;
pub mod participants;
pub mod questions;
pub mod respondents;
pub mod responses;
pub mod users;

pub use cycles::CyclesRepo;
pub use participants::ParticipantsRepo;
pub use questions::QuestionsRepo;
pub use respondents::RespondentsRepo;
pub use responses::ResponsesRepo;
pub use users::UsersRepo;
