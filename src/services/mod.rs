pub mod chat_service;
pub mod conversation_store;
pub mod message_pipeline;
