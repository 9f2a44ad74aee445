pub mod causes;
pub mod donations;
pub mod donors;
pub mod events;
pub mod gamification;
pub mod messages;
pub mod onboarding;
pub mod reports;
pub mod sponsors;
pub mod users;
