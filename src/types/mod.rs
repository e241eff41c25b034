pub mod gemini;
pub mod requests;
