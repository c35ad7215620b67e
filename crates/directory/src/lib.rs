//! Directory side of onboard: the gateway to Active Directory, the dry-run
//! wrapper, and the per-record provisioning pipeline.
//!
//! Records flow through [`pipeline::ProvisioningPipeline`], which ensures OUs,
//! accounts and group memberships through [`resolver::IdempotencyResolver`]
//! and collects outcomes in [`aggregator::OutcomeAggregator`].

pub mod aggregator;
pub mod client;
pub mod dry_run;
pub mod gateway;
pub mod home;
pub mod models;
pub mod notify;
pub mod ou;
pub mod password;
pub mod pipeline;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;
