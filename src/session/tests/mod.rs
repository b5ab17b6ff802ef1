use super::test_helpers::*;
use super::*;
use crate::error::Error;
use crate::types::StreamSource;
use std::time::Duration;
