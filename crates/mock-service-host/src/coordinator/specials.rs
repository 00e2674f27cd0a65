//! Canned answers for infrastructure endpoints that live outside any
//! resource-provider API surface: subscriptions, resource groups, locations
//! and tenants.

use crate::models::VirtualServerRequest;
use crate::responder::{ExampleResponse, ExampleResponses};
use crate::spec::{ValidationRequest, UNKNOWN_PROVIDER_NAMESPACE};
use crate::utils::{get_path, get_pure_url, replace_string_value};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

/// Tenant/subscription id used by the canned payloads
pub const PLACEHOLDER_ID: &str = "0000000-0000-0000-0000-000000000000";

static LOCATIONS: Lazy<Value> = Lazy::new(|| {
    let locations = [
        ("eastus", "East US", "(US) East US", "US", "-79.8164", "37.3719"),
        ("eastus2", "East US 2", "(US) East US 2", "US", "-78.3889", "36.6681"),
        ("westus", "West US", "(US) West US", "US", "-122.417", "37.783"),
        ("westus2", "West US 2", "(US) West US 2", "US", "-119.852", "47.233"),
        ("centralus", "Central US", "(US) Central US", "US", "-93.6208", "41.5908"),
        ("northeurope", "North Europe", "(Europe) North Europe", "Europe", "-6.2597", "53.3478"),
        ("westeurope", "West Europe", "(Europe) West Europe", "Europe", "4.9", "52.3667"),
        ("southeastasia", "Southeast Asia", "(Asia Pacific) Southeast Asia", "Asia Pacific", "103.833", "1.283"),
        ("japaneast", "Japan East", "(Asia Pacific) Japan East", "Asia Pacific", "139.77", "35.68"),
        ("australiaeast", "Australia East", "(Asia Pacific) Australia East", "Asia Pacific", "151.2094", "-33.86"),
    ];
    let value: Vec<Value> = locations
        .iter()
        .map(|(name, display, regional, group, longitude, latitude)| {
            json!({
                "id": format!("/subscriptions/{PLACEHOLDER_ID}/locations/{name}"),
                "name": name,
                "displayName": display,
                "regionalDisplayName": regional,
                "metadata": {
                    "regionType": "Physical",
                    "regionCategory": "Recommended",
                    "geographyGroup": group,
                    "longitude": longitude,
                    "latitude": latitude
                }
            })
        })
        .collect();
    json!({ "value": value })
});

static TENANTS: Lazy<Value> = Lazy::new(|| {
    json!({
        "value": [{
            "id": format!("/tenants/{PLACEHOLDER_ID}"),
            "tenantId": PLACEHOLDER_ID,
            "countryCode": "US",
            "displayName": "Default Directory",
            "domains": ["mockservicehost.onmicrosoft.com"],
            "defaultDomain": "mockservicehost.onmicrosoft.com",
            "tenantCategory": "Home",
            "tenantType": "AAD"
        }]
    })
});

fn ok(body: Value) -> ExampleResponses {
    let mut responses = ExampleResponses::new();
    responses.insert("200".to_string(), ExampleResponse::new(body));
    responses
}

/// Answer a well-known endpoint, or `None` when the request is not one.
///
/// Only requests outside every provider namespace qualify.
pub fn handle_specials(
    req: &VirtualServerRequest,
    validation_request: &ValidationRequest,
) -> Option<ExampleResponses> {
    if validation_request.provider_namespace != UNKNOWN_PROVIDER_NAMESPACE {
        return None;
    }

    let pure_url = get_pure_url(&req.url);
    let path = get_path(pure_url);
    match path.as_slice() {
        // /subscriptions/{subscriptionId}
        [_, subscription_id] => Some(ok(json!({
            "id": format!("/subscriptions/{subscription_id}"),
            "authorizationSource": "RoleBased",
            "managedByTenants": [],
            "subscriptionId": subscription_id,
            "tenantId": PLACEHOLDER_ID,
            "displayName": "Name of the subscription",
            "state": "Enabled",
            "subscriptionPolicies": {
                "locationPlacementId": "Internal_2014-09-01",
                "quotaId": "Internal_2014-09-01",
                "spendingLimit": "Off"
            }
        }))),
        // /subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}
        [_, _, kind, name] if kind.eq_ignore_ascii_case("resourcegroups") => Some(ok(json!({
            "id": pure_url,
            "location": "eastus",
            "managedBy": null,
            "name": name,
            "properties": {
                "provisioningState": "Succeeded"
            },
            "tags": {},
            "type": "Microsoft.Resources/resourceGroups"
        }))),
        // /subscriptions/{subscriptionId}/locations
        [_, subscription_id, kind] if kind.eq_ignore_ascii_case("locations") => {
            let mut body = LOCATIONS.clone();
            replace_string_value(PLACEHOLDER_ID, subscription_id, &mut body);
            Some(ok(body))
        }
        [kind] if kind.eq_ignore_ascii_case("tenants") => Some(ok(TENANTS.clone())),
        _ => None,
    }
}
