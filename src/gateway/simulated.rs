// ABOUTME: SimulatedArray - in-memory gateway and group membership service.
// ABOUTME: Records every call and supports scripted faults, delays and responses.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CommandOutput, Gateway};
use crate::config::{ListingFormat, MembershipConfig};
use crate::error::TransportError;
use crate::membership::{AntennaId, Group};

/// A scripted failure for one specific call.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Answer with this stderr instead of "OK".
    Reject(String),
    /// Fail as if the daemon could not be reached.
    Unreachable,
    /// Report a move as successful but leave these antennas where they are.
    Stick(Vec<AntennaId>),
}

/// How the simulated list command answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingStyle {
    /// Every non-empty group on its own `<group> <ant> ...` line, whatever
    /// group was asked for.
    AllGroups,
    /// Only the queried group's line, even when it has no members.
    QueriedGroup,
    /// Only the queried group's members, no group column.
    BareTokens,
}

impl ListingStyle {
    /// The style a service configured with `format` would answer in.
    pub fn for_format(format: ListingFormat) -> Self {
        match format {
            ListingFormat::Prefixed => ListingStyle::AllGroups,
            ListingFormat::Bare => ListingStyle::BareTokens,
        }
    }
}

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<String>,
}

type Responder = Arc<dyn Fn(&[String]) -> CommandOutput + Send + Sync>;

#[derive(Default)]
struct SimState {
    groups: BTreeMap<Group, Vec<AntennaId>>,
    calls: Vec<Invocation>,
    /// Keyed by command and the zero-based index of the call to that command.
    faults: HashMap<(String, usize), Fault>,
    responders: HashMap<String, Responder>,
    delays: HashMap<String, Duration>,
}

/// A simulated array: group registry plus device daemons.
///
/// The list command answers in the style matching the configured listing
/// format, by default one `"<group> <ant> <ant> ..."` line for every
/// non-empty group. The move command takes `[from, to, ants...]` and moves every
/// listed antenna currently in `from`, ignoring the rest. Any other command
/// answers "OK" unless a responder is registered for it.
pub struct SimulatedArray {
    state: Mutex<SimState>,
    list_command: String,
    move_command: String,
    listing: ListingStyle,
}

impl SimulatedArray {
    pub fn new(config: &MembershipConfig) -> Self {
        Self {
            state: Mutex::new(SimState::default()),
            list_command: config.list_command.clone(),
            move_command: config.move_command.clone(),
            listing: ListingStyle::for_format(config.listing_format),
        }
    }

    /// Answer the list command in `style`.
    pub fn with_listing(mut self, style: ListingStyle) -> Self {
        self.listing = style;
        self
    }

    /// A simulator with `antennas` in the configured idle group.
    pub fn idle<I, A>(config: &MembershipConfig, antennas: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<AntennaId>,
    {
        Self::new(config).with_group(config.idle_group.clone(), antennas)
    }

    /// Seed `group` with `antennas`.
    pub fn with_group<I, A>(mut self, group: impl Into<Group>, antennas: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<AntennaId>,
    {
        self.state
            .get_mut()
            .groups
            .entry(group.into())
            .or_default()
            .extend(antennas.into_iter().map(Into::into));
        self
    }

    /// Current members of `group`, in registry order.
    pub async fn members(&self, group: &Group) -> Vec<AntennaId> {
        let state = self.state.lock().await;
        state.groups.get(group).cloned().unwrap_or_default()
    }

    /// Every group that currently lists `antenna`.
    pub async fn groups_of(&self, antenna: &AntennaId) -> Vec<Group> {
        let state = self.state.lock().await;
        state
            .groups
            .iter()
            .filter(|(_, members)| members.contains(antenna))
            .map(|(group, _)| group.clone())
            .collect()
    }

    pub async fn calls(&self) -> Vec<Invocation> {
        self.state.lock().await.calls.clone()
    }

    pub async fn calls_to(&self, command: &str) -> Vec<Invocation> {
        let state = self.state.lock().await;
        state
            .calls
            .iter()
            .filter(|c| c.command == command)
            .cloned()
            .collect()
    }

    /// Script a fault for the `nth` (zero-based) call to `command`.
    pub async fn inject(&self, command: &str, nth: usize, fault: Fault) {
        let mut state = self.state.lock().await;
        state.faults.insert((command.to_string(), nth), fault);
    }

    /// Answer every call to `command` with `responder`.
    pub async fn respond_with<F>(&self, command: &str, responder: F)
    where
        F: Fn(&[String]) -> CommandOutput + Send + Sync + 'static,
    {
        let mut state = self.state.lock().await;
        state
            .responders
            .insert(command.to_string(), Arc::new(responder));
    }

    /// Hold every call to `command` for `delay` before answering.
    pub async fn set_delay(&self, command: &str, delay: Duration) {
        let mut state = self.state.lock().await;
        state.delays.insert(command.to_string(), delay);
    }

    fn list(&self, state: &SimState, args: &[String]) -> CommandOutput {
        let Some(group) = args.first() else {
            return CommandOutput::rejected(format!("usage: {} <group>\n", self.list_command));
        };
        let line = |members: &[AntennaId]| {
            members
                .iter()
                .map(AntennaId::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        };
        let queried = state
            .groups
            .get(&Group::new(group.as_str()))
            .map(|m| line(m.as_slice()))
            .unwrap_or_default();

        let stdout = match self.listing {
            ListingStyle::AllGroups => state
                .groups
                .iter()
                .filter(|(_, members)| !members.is_empty())
                .map(|(g, members)| format!("{} {}\n", g, line(members.as_slice())))
                .collect::<String>(),
            ListingStyle::QueriedGroup => format!("{} {}\n", group, queried),
            ListingStyle::BareTokens => format!("{}\n", queried),
        };
        CommandOutput::ok(stdout)
    }

    fn apply_move(&self, state: &mut SimState, args: &[String], stuck: &[AntennaId]) -> CommandOutput {
        if args.len() < 2 {
            return CommandOutput::rejected(format!(
                "usage: {} <from> <to> <ants...>\n",
                self.move_command
            ));
        }
        let from = Group::new(args[0].as_str());
        let to = Group::new(args[1].as_str());

        for ant in args[2..].iter().map(|a| AntennaId::new(a.as_str())) {
            if stuck.contains(&ant) {
                continue;
            }
            let source = state.groups.entry(from.clone()).or_default();
            let Some(pos) = source.iter().position(|a| *a == ant) else {
                continue;
            };
            source.remove(pos);
            state.groups.entry(to.clone()).or_default().push(ant);
        }

        self.list(state, &args[1..2])
    }
}

#[async_trait]
impl Gateway for SimulatedArray {
    async fn execute(&self, command: &str, args: &[String]) -> Result<CommandOutput, TransportError> {
        let delay = self.state.lock().await.delays.get(command).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        let nth = state.calls.iter().filter(|c| c.command == command).count();
        state.calls.push(Invocation {
            command: command.to_string(),
            args: args.to_vec(),
        });

        let mut stuck = Vec::new();
        match state.faults.remove(&(command.to_string(), nth)) {
            Some(Fault::Reject(stderr)) => return Ok(CommandOutput::rejected(stderr)),
            Some(Fault::Unreachable) => {
                return Err(TransportError::Unreachable {
                    command: command.to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "simulated daemon unreachable",
                    ),
                });
            }
            Some(Fault::Stick(ants)) => stuck = ants,
            None => {}
        }

        if command == self.list_command {
            return Ok(self.list(&state, args));
        }
        if command == self.move_command {
            return Ok(self.apply_move(&mut state, args, &stuck));
        }
        if let Some(responder) = state.responders.get(command) {
            return Ok(responder(args));
        }
        Ok(CommandOutput::ok(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_move_only_moves_members_of_source() {
        let sim = SimulatedArray::idle(&MembershipConfig::default(), ["1a", "2b"])
            .with_group("bfa", ["3c"]);

        sim.invoke("antreserve", &args(&["none", "bfa", "1a", "3c"]))
            .await
            .unwrap();

        assert_eq!(sim.members(&Group::none()).await, vec![AntennaId::new("2b")]);
        assert_eq!(
            sim.members(&Group::bfa()).await,
            vec![AntennaId::new("3c"), AntennaId::new("1a")]
        );
    }

    #[tokio::test]
    async fn test_list_shows_every_non_empty_group() {
        let sim = SimulatedArray::idle(&MembershipConfig::default(), ["1a", "2b"])
            .with_group("maint", ["3c"])
            .with_group("bfa", Vec::<AntennaId>::new());
        let output = sim.invoke("antlist", &args(&["bfa"])).await.unwrap();
        assert_eq!(output.stdout_text(), "maint 3c\nnone 1a 2b\n");
    }

    #[tokio::test]
    async fn test_list_queried_group_and_bare_styles() {
        let sim = SimulatedArray::idle(&MembershipConfig::default(), ["1a", "2b"])
            .with_listing(ListingStyle::QueriedGroup);
        let output = sim.invoke("antlist", &args(&["bfa"])).await.unwrap();
        assert_eq!(output.stdout_text(), "bfa \n");

        let sim = SimulatedArray::idle(&MembershipConfig::default(), ["1a", "2b"])
            .with_listing(ListingStyle::BareTokens);
        let output = sim.invoke("antlist", &args(&["none"])).await.unwrap();
        assert_eq!(output.stdout_text(), "1a 2b\n");
    }

    #[tokio::test]
    async fn test_fault_applies_to_nth_call_only() {
        let sim = SimulatedArray::new(&MembershipConfig::default());
        sim.inject("atten", 1, Fault::Reject("ERROR\n".to_string())).await;

        assert!(sim.invoke("atten", &[]).await.is_ok());
        assert!(sim.invoke("atten", &[]).await.is_err());
        assert!(sim.invoke("atten", &[]).await.is_ok());
        assert_eq!(sim.calls_to("atten").await.len(), 3);
    }

    #[tokio::test]
    async fn test_stuck_antenna_stays_in_source() {
        let sim = SimulatedArray::idle(&MembershipConfig::default(), ["1a", "2b"]);
        sim.inject("antreserve", 0, Fault::Stick(vec![AntennaId::new("1a")]))
            .await;

        let result = sim
            .invoke("antreserve", &args(&["none", "bfa", "1a", "2b"]))
            .await;

        assert!(result.is_ok());
        assert_eq!(sim.groups_of(&AntennaId::new("1a")).await, vec![Group::none()]);
        assert_eq!(sim.groups_of(&AntennaId::new("2b")).await, vec![Group::bfa()]);
    }

    #[tokio::test]
    async fn test_responder_answers_custom_command() {
        let sim = SimulatedArray::new(&MembershipConfig::default());
        sim.respond_with("atalna", |args| CommandOutput::ok(format!("{}\n", args.len())))
            .await;

        let output = sim.invoke("atalna", &args(&["status", "1a"])).await.unwrap();
        assert_eq!(output.stdout_text(), "2\n");
    }
}
