pub mod auditor;
pub mod critic;
pub mod proposer;
pub mod synthesizer;
