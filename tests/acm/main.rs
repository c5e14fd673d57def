mod handoff_test;
mod provisioning_test;
mod test_utils;
