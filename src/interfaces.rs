//! Standard message and service types
//!
//! Hand-written equivalents of a few common generated interfaces, enough for
//! the demo binary, tests and benches.

use crate::message::{Message, ServiceType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringMessage {
    pub data: String,
}

impl Message for StringMessage {
    const TYPE_NAME: &'static str = "std_msgs/msg/String";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Int64Message {
    pub data: i64,
}

impl Message for Int64Message {
    const TYPE_NAME: &'static str = "std_msgs/msg/Int64";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyMessage {}

impl Message for EmptyMessage {
    const TYPE_NAME: &'static str = "std_msgs/msg/Empty";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTwoIntsRequest {
    pub a: i64,
    pub b: i64,
}

impl Message for AddTwoIntsRequest {
    const TYPE_NAME: &'static str = "example_interfaces/srv/AddTwoInts_Request";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTwoIntsResponse {
    pub sum: i64,
}

impl Message for AddTwoIntsResponse {
    const TYPE_NAME: &'static str = "example_interfaces/srv/AddTwoInts_Response";
}

/// `example_interfaces/srv/AddTwoInts`
pub struct AddTwoInts;

impl ServiceType for AddTwoInts {
    const SERVICE_TYPE: &'static str = "example_interfaces/srv/AddTwoInts";
    type Request = AddTwoIntsRequest;
    type Response = AddTwoIntsResponse;
}
