pub mod icebreaker_context;
