//! Name-to-command resolution.
//!
//! New saga steps are added by registering a constructor under a new name
//! and listing that name in the pipeline configuration. The orchestrator
//! never branches on step type.

use std::collections::HashMap;
use std::sync::Arc;

use super::{AllocationCommand, Command, CommandArgs, PaymentCommand, SeatCommand};
use crate::booking_saga::{STEP_ALLOCATION, STEP_PAYMENT, STEP_SEAT};
use crate::error::{Result, SagaError};

/// Builds one command from the booking's arguments.
pub type CommandConstructor = Arc<dyn Fn(&CommandArgs) -> Box<dyn Command> + Send + Sync>;

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Overridable map of step-type names to command constructors.
///
/// Names are case-insensitive.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    constructors: HashMap<String, CommandConstructor>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the seat, payment and allocation commands.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(STEP_SEAT, |args| Box::new(SeatCommand::new(args)));
        registry.register(STEP_PAYMENT, |args| Box::new(PaymentCommand::new(args)));
        registry.register(STEP_ALLOCATION, |args| {
            Box::new(AllocationCommand::new(args))
        });
        registry
    }

    /// Registers `constructor` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: &str, constructor: F) -> &mut Self
    where
        F: Fn(&CommandArgs) -> Box<dyn Command> + Send + Sync + 'static,
    {
        self.constructors
            .insert(normalize(name), Arc::new(constructor));
        self
    }

    /// Returns true if a constructor is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(&normalize(name))
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    fn get(&self, name: &str) -> Result<&CommandConstructor> {
        self.constructors
            .get(&normalize(name))
            .ok_or_else(|| SagaError::InvalidCommand(name.to_string()))
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("names", &self.names())
            .finish()
    }
}

/// A validated pipeline: the configured step sequence plus the registry
/// that resolves it.
#[derive(Debug, Clone)]
pub struct CommandFactory {
    registry: CommandRegistry,
    steps: Vec<String>,
}

impl CommandFactory {
    /// Creates a factory, failing with `InvalidCommand` on the first
    /// configured name the registry does not know.
    pub fn new(registry: CommandRegistry, steps: &[String]) -> Result<Self> {
        for step in steps {
            registry.get(step)?;
        }
        Ok(Self {
            registry,
            steps: steps.to_vec(),
        })
    }

    /// Returns the configured step sequence.
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Builds the forward pipeline, one command per configured step.
    pub fn commands(&self, args: &CommandArgs) -> Result<Vec<Box<dyn Command>>> {
        self.steps
            .iter()
            .map(|step| self.command(step, args))
            .collect()
    }

    /// Builds the single command registered under `name`.
    pub fn command(&self, name: &str, args: &CommandArgs) -> Result<Box<dyn Command>> {
        let constructor = self.registry.get(name)?;
        Ok(constructor(args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use saga_common::BookingId;

    use crate::booking::Booking;
    use crate::ledger::{BookingLedger, BookingStore, InMemoryBookingStore};
    use crate::services::Collaborators;

    struct NoopCommand;

    #[async_trait]
    impl Command for NoopCommand {
        fn name(&self) -> &str {
            "noop"
        }

        async fn execute(&self) -> Result<()> {
            Ok(())
        }

        async fn undo(&self) -> Result<()> {
            Ok(())
        }
    }

    async fn args() -> CommandArgs {
        let store = Arc::new(InMemoryBookingStore::new());
        let booking = Booking::new(BookingId::new(), "John Doe", "FL001", "1A");
        let id = booking.id();
        store.insert(booking).await.unwrap();
        CommandArgs {
            ledger: BookingLedger::new(id, store),
            passenger_name: "John Doe".to_string(),
            flight_number: "FL001".to_string(),
            seat_number: "1A".to_string(),
            payment_details: None,
            collaborators: Collaborators::in_memory(),
            timeout: Duration::from_secs(1),
        }
    }

    fn steps(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_default_pipeline_order() {
        let factory = CommandFactory::new(
            CommandRegistry::with_defaults(),
            &steps(&["seat", "payment", "allocation"]),
        )
        .unwrap();
        let commands = factory.commands(&args().await).unwrap();

        let names: Vec<_> = commands.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["seat", "payment", "allocation"]);
    }

    #[tokio::test]
    async fn test_names_are_case_insensitive() {
        let factory =
            CommandFactory::new(CommandRegistry::with_defaults(), &steps(&["SEAT", "Payment"]))
                .unwrap();
        let command = factory.command("ALLOCATION", &args().await).unwrap();
        assert_eq!(command.name(), "allocation");
    }

    #[test]
    fn test_unknown_name_fails_at_construction() {
        let err = CommandFactory::new(CommandRegistry::with_defaults(), &steps(&["seat", "hotel"]))
            .unwrap_err();
        assert!(matches!(err, SagaError::InvalidCommand(ref name) if name == "hotel"));
        assert_eq!(err.to_string(), "Command 'hotel' is not supported");
    }

    #[tokio::test]
    async fn test_registered_command_extends_pipeline() {
        let mut registry = CommandRegistry::with_defaults();
        registry.register("noop", |_| Box::new(NoopCommand));

        let factory = CommandFactory::new(registry, &steps(&["seat", "noop"])).unwrap();
        let commands = factory.commands(&args().await).unwrap();
        assert_eq!(commands[1].name(), "noop");
    }

    #[tokio::test]
    async fn test_register_overrides_existing_entry() {
        let mut registry = CommandRegistry::with_defaults();
        registry.register("Seat", |_| Box::new(NoopCommand));

        let factory = CommandFactory::new(registry.clone(), &steps(&["seat"])).unwrap();
        assert_eq!(factory.command("seat", &args().await).unwrap().name(), "noop");
        assert_eq!(registry.names(), vec!["allocation", "payment", "seat"]);
    }

    #[test]
    fn test_empty_registry_knows_nothing() {
        let registry = CommandRegistry::new();
        assert!(!registry.contains("seat"));
        assert!(CommandFactory::new(registry, &steps(&["seat"])).is_err());
    }
}
