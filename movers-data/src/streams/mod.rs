/// Read timeout wrapper that ends a silent WebSocket stream.
pub mod timeout;
