pub mod completion_llm;
pub mod db;
pub mod file_store;
pub mod sst;
pub mod tts;
pub mod validator;

pub use completion_llm::OpenAiCompletionAdapter;
pub use db::PgReportStore;
pub use file_store::JsonFileReportStore;
pub use sst::OpenAiSstAdapter;
pub use tts::OpenAiTtsAdapter;
pub use validator::AllowListValidator;
