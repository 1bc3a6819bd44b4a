pub mod ticket_client;
