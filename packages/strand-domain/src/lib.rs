pub mod content_hash;
pub mod nuance;
pub mod reference;
pub mod subtopics;
