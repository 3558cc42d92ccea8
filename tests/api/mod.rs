mod access_tests;
mod auth_tests;
mod chat_tests;
mod health_tests;
