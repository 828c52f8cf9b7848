// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Responder side: connects an action provider plugin to the bus.

use std::sync::Arc;

use cadenza_bus::{respond, EventBus, Subscription};
use cadenza_core::ActionProvider;
use tracing::warn;

use crate::protocol::{
    ActionList, ExecuteActionRequest, ExecuteActionResponse, RequestActions,
};

/// Live bus subscriptions answering for one action provider.
#[derive(Debug)]
pub struct ActionBinding {
    plugin_id: String,
    subscriptions: [Subscription; 2],
}

impl ActionBinding {
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Stop answering requests.
    pub fn detach(self) {
        for subscription in &self.subscriptions {
            subscription.unsubscribe();
        }
    }
}

/// Answer action requests on `bus` with `provider`.
///
/// List requests are answered when the provider offers at least one action.
/// Execute requests are answered only for the provider's own actions;
/// handler errors are logged and reported as not handled.
pub fn attach_action_provider(bus: &EventBus, provider: Arc<dyn ActionProvider>) -> ActionBinding {
    let plugin_id = provider.id().to_string();

    let lister = Arc::clone(&provider);
    let list = respond::<RequestActions, _, _>(bus, move |request| {
        let provider = Arc::clone(&lister);
        async move {
            let plugin_id = provider.id().to_string();
            match provider.actions_for(&request.track, request.context).await {
                Ok(actions) if actions.is_empty() => None,
                Ok(actions) => Some(ActionList { plugin_id, actions }),
                Err(e) => {
                    warn!(plugin_id = %plugin_id, error = %e, "listing track actions failed");
                    None
                }
            }
        }
    });

    let executor = provider;
    let execute = respond::<ExecuteActionRequest, _, _>(bus, move |request| {
        let provider = Arc::clone(&executor);
        async move {
            let plugin_id = provider.id().to_string();
            if request.plugin_id != plugin_id {
                return None;
            }
            let handled = match provider.execute_action(&request.action_id, &request.track).await {
                Ok(handled) => handled,
                Err(e) => {
                    warn!(
                        plugin_id = %plugin_id,
                        action_id = %request.action_id,
                        error = %e,
                        "track action failed"
                    );
                    false
                }
            };
            Some(ExecuteActionResponse {
                plugin_id,
                action_id: request.action_id,
                handled,
            })
        }
    });

    ActionBinding {
        plugin_id,
        subscriptions: [list, execute],
    }
}
