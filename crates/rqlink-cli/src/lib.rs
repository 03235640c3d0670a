// Copyright 2025 rqlink Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # rqlink CLI
//!
//! Command-line access to a replicated SQL cluster through rqlink.
//!
//! - **status**: probe the cluster and print leader, peers and leader health
//! - **exec** / **query**: run one statement and print the result as JSON
//! - **ping**: check that a node can be bound
//! - **parse**: show how a connection string is interpreted
//!
//! This library half holds the JSON conversions used by the binary so they
//! can be tested without a cluster.

pub mod output;
