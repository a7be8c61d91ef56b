// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders for domain types, shared across crates via the
//! `test-support` feature (mirrors `oj-core`'s `test_support` module).

use std::collections::HashMap;
use std::path::PathBuf;

use crate::action::{Action, ActionPackage, ToolKind};
use crate::id::{ActionId, ActionPackageId, RunId};
use crate::managed_param::ManagedParamKind;
use crate::run::{Run, RunStatus};

crate::builder! {
    pub struct ActionPackageBuilder => ActionPackage {
        into {
            slug: String = "greeter",
            manifest_hash: String = "deadbeef",
        }
        set {
            directory: PathBuf = PathBuf::from("/tmp/greeter"),
            declared_endpoints: Vec<String> = Vec::new(),
            enabled: bool = true,
        }
        computed {
            id: ActionPackageId = ActionPackageId::new(),
        }
    }
}

crate::builder! {
    pub struct ActionBuilder => Action {
        into {
            slug: String = "greet",
            display_name: String = "Greet",
        }
        set {
            package_id: ActionPackageId = ActionPackageId::new(),
            input_schema: serde_json::Value = serde_json::json!({"type": "object"}),
            output_schema: serde_json::Value = serde_json::json!({"type": "string"}),
            managed_params: HashMap<String, ManagedParamKind> = HashMap::new(),
            consequential: bool = false,
            source_file: PathBuf = PathBuf::from("actions.py"),
            source_line: u32 = 1,
            tool_kind: ToolKind = ToolKind::Action,
        }
        computed {
            id: ActionId = ActionId::new(),
        }
    }
}

crate::builder! {
    pub struct RunBuilder => Run {
        set {
            action_id: ActionId = ActionId::new(),
            status: RunStatus = RunStatus::NotRun,
            run_number: u64 = 1,
            artifact_dir: Option<PathBuf> = None,
            input_payload: serde_json::Value = serde_json::json!({}),
            result_payload: Option<serde_json::Value> = None,
            error_message: Option<String> = None,
            request_id: Option<String> = None,
            async_callback_url: Option<String> = None,
            created_at_ms: u64 = 0,
            started_at_ms: Option<u64> = None,
            finished_at_ms: Option<u64> = None,
        }
        computed {
            id: RunId = RunId::new(),
        }
    }
}
