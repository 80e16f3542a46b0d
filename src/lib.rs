// feedback-guard: toxicity check endpoint for user-submitted feedback.
//
// This is the library root. The binary in main.rs wires these together:
// config -> classifier -> web server.

pub mod classifier;
pub mod config;
pub mod moderation;
pub mod output;
pub mod web;
