//! Behavioural scenarios for server provisioning against an in-memory cloud.

mod provisioning;
