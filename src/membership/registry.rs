// ABOUTME: GroupRegistry - client for the group membership service.
// ABOUTME: Lists and moves antennas through the gateway; nothing is cached.

use std::sync::Arc;

use super::{AntennaId, Group};
use crate::config::{ListingFormat, MembershipConfig};
use crate::error::TransportError;
use crate::gateway::Gateway;

/// Reads and mutates group membership through the gateway.
///
/// Every call goes to the service. Membership is never cached, so each
/// verification step sees the registry as it is at that moment.
#[derive(Clone)]
pub struct GroupRegistry {
    gateway: Arc<dyn Gateway>,
    list_command: String,
    move_command: String,
    listing_format: ListingFormat,
}

impl GroupRegistry {
    pub fn new(gateway: Arc<dyn Gateway>, config: &MembershipConfig) -> Self {
        Self {
            gateway,
            list_command: config.list_command.clone(),
            move_command: config.move_command.clone(),
            listing_format: config.listing_format,
        }
    }

    /// Current members of `group`, in the order the service lists them.
    pub async fn list(&self, group: &Group) -> Result<Vec<AntennaId>, TransportError> {
        let args = vec![group.to_string()];
        let output = self.gateway.invoke(&self.list_command, &args).await?;
        let listing = parse_listing(group, &output.stdout_text(), self.listing_format);
        if listing.repeated_lines > 0 {
            tracing::warn!(
                group = %group,
                repeated = listing.repeated_lines,
                "group listed on more than one line, merging members"
            );
        }
        Ok(listing.members)
    }

    /// Move `antennas` from one group to another as a single call.
    pub async fn move_antennas(
        &self,
        from: &Group,
        to: &Group,
        antennas: &[AntennaId],
    ) -> Result<(), TransportError> {
        let mut args = vec![from.to_string(), to.to_string()];
        args.extend(antennas.iter().map(AntennaId::to_string));
        self.gateway.invoke(&self.move_command, &args).await?;
        Ok(())
    }
}

/// Members of one group as read from a listing.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Listing {
    pub members: Vec<AntennaId>,
    /// Lines for the group beyond the first.
    pub repeated_lines: usize,
}

/// Parse a whitespace-tokenized group listing.
///
/// In the prefixed format only lines whose first column is `group`
/// (`"bfa 1a 2b"`) count. A listing with no such line means the group is
/// empty, even when other groups are listed. In the bare format every token
/// is a member.
pub(crate) fn parse_listing(group: &Group, stdout: &str, format: ListingFormat) -> Listing {
    match format {
        ListingFormat::Bare => Listing {
            members: stdout.split_whitespace().map(AntennaId::from).collect(),
            repeated_lines: 0,
        },
        ListingFormat::Prefixed => {
            let mut listing = Listing::default();
            let mut seen = false;
            for line in stdout.lines() {
                let mut cols = line.split_whitespace();
                if cols.next() != Some(group.as_str()) {
                    continue;
                }
                if seen {
                    listing.repeated_lines += 1;
                }
                seen = true;
                listing.members.extend(cols.map(AntennaId::from));
            }
            listing
        }
    }
}
