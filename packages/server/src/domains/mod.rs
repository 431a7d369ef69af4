pub mod icebreaker;
pub mod jobs;
pub mod leads;
pub mod organization;
