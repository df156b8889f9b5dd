//! These models represent the objects passed around by the society
//!
//! There are a few related formats to interact with:
//! - openai-compatible messages/tools, sent between the agents and the LLM
//! - toolkit requests, sent from an agent to the toolkits backing its tools
//! - transcript rows, returned to the caller after a run
//!
//! Incoming wire data is converted immediately into these internal structs
//! with to/from helpers. Because the internal model must serve all three
//! uses, it is not an exact match for any single wire format.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
