// Core layer - shared types and configuration
pub mod core;

// Features layer - all feature modules
pub mod features;

// Persistence
pub mod database;

// Interaction dispatch and response rendering
pub mod message_components;

// Application layer
pub mod commands;

pub use core::Config;

pub use features::{
    // Services
    CurrencyClient, PlacesClient, WeatherClient,
    // Rate limiting
    RateLimiter,
    // Reminders
    ReminderScheduler, SchedulerSettings, ServiceSummary,
};
