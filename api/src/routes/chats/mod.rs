pub mod chat_request;
pub mod chats_route;
