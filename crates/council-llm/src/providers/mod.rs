//! Concrete LLM providers

pub mod openai;
