//! Delivery rule match conditions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::stored::StoredItem;
use crate::error::CdnError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchVariable {
    RemoteAddress,
    RequestMethod,
    QueryString,
    PostArgs,
    RequestHeader,
    RequestUri,
    RequestBody,
    RequestScheme,
    UrlPath,
    UrlFileExtension,
    UrlFileName,
    HttpVersion,
    IsDevice,
    Cookies,
    SocketAddr,
    ClientPort,
    ServerPort,
    HostName,
    SslProtocol,
}

impl MatchVariable {
    pub const ALL: [MatchVariable; 19] = [
        MatchVariable::RemoteAddress,
        MatchVariable::RequestMethod,
        MatchVariable::QueryString,
        MatchVariable::PostArgs,
        MatchVariable::RequestHeader,
        MatchVariable::RequestUri,
        MatchVariable::RequestBody,
        MatchVariable::RequestScheme,
        MatchVariable::UrlPath,
        MatchVariable::UrlFileExtension,
        MatchVariable::UrlFileName,
        MatchVariable::HttpVersion,
        MatchVariable::IsDevice,
        MatchVariable::Cookies,
        MatchVariable::SocketAddr,
        MatchVariable::ClientPort,
        MatchVariable::ServerPort,
        MatchVariable::HostName,
        MatchVariable::SslProtocol,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchVariable::RemoteAddress => "RemoteAddress",
            MatchVariable::RequestMethod => "RequestMethod",
            MatchVariable::QueryString => "QueryString",
            MatchVariable::PostArgs => "PostArgs",
            MatchVariable::RequestHeader => "RequestHeader",
            MatchVariable::RequestUri => "RequestUri",
            MatchVariable::RequestBody => "RequestBody",
            MatchVariable::RequestScheme => "RequestScheme",
            MatchVariable::UrlPath => "UrlPath",
            MatchVariable::UrlFileExtension => "UrlFileExtension",
            MatchVariable::UrlFileName => "UrlFileName",
            MatchVariable::HttpVersion => "HttpVersion",
            MatchVariable::IsDevice => "IsDevice",
            MatchVariable::Cookies => "Cookies",
            MatchVariable::SocketAddr => "SocketAddr",
            MatchVariable::ClientPort => "ClientPort",
            MatchVariable::ServerPort => "ServerPort",
            MatchVariable::HostName => "HostName",
            MatchVariable::SslProtocol => "SslProtocol",
        }
    }

    /// ARM discriminator of the parameters object
    pub fn type_name(&self) -> &'static str {
        match self {
            MatchVariable::RemoteAddress => "DeliveryRuleRemoteAddressConditionParameters",
            MatchVariable::RequestMethod => "DeliveryRuleRequestMethodConditionParameters",
            MatchVariable::QueryString => "DeliveryRuleQueryStringConditionParameters",
            MatchVariable::PostArgs => "DeliveryRulePostArgsConditionParameters",
            MatchVariable::RequestHeader => "DeliveryRuleRequestHeaderConditionParameters",
            MatchVariable::RequestUri => "DeliveryRuleRequestUriConditionParameters",
            MatchVariable::RequestBody => "DeliveryRuleRequestBodyConditionParameters",
            MatchVariable::RequestScheme => "DeliveryRuleRequestSchemeConditionParameters",
            MatchVariable::UrlPath => "DeliveryRuleUrlPathMatchConditionParameters",
            MatchVariable::UrlFileExtension => "DeliveryRuleUrlFileExtensionMatchConditionParameters",
            MatchVariable::UrlFileName => "DeliveryRuleUrlFilenameConditionParameters",
            MatchVariable::HttpVersion => "DeliveryRuleHttpVersionConditionParameters",
            MatchVariable::IsDevice => "DeliveryRuleIsDeviceConditionParameters",
            MatchVariable::Cookies => "DeliveryRuleCookiesConditionParameters",
            MatchVariable::SocketAddr => "DeliveryRuleSocketAddrConditionParameters",
            MatchVariable::ClientPort => "DeliveryRuleClientPortConditionParameters",
            MatchVariable::ServerPort => "DeliveryRuleServerPortConditionParameters",
            MatchVariable::HostName => "DeliveryRuleHostNameConditionParameters",
            MatchVariable::SslProtocol => "DeliveryRuleSslProtocolConditionParameters",
        }
    }

    pub fn accepts_selector(&self) -> bool {
        matches!(
            self,
            MatchVariable::PostArgs | MatchVariable::RequestHeader | MatchVariable::Cookies
        )
    }

    pub fn accepts_transforms(&self) -> bool {
        !matches!(self, MatchVariable::RequestMethod | MatchVariable::RequestScheme)
    }

    pub fn default_operator(&self) -> Option<&'static str> {
        match self {
            MatchVariable::RequestMethod | MatchVariable::RequestScheme => Some("Equal"),
            _ => None,
        }
    }
}

impl fmt::Display for MatchVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchVariable {
    type Err = CdnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MatchVariable::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| CdnError::UnrecognizedConditionVariable(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub name: MatchVariable,
    pub parameters: ConditionParameters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionParameters {
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negate_condition: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transforms: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

/// Builder input, one field per CLI flag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionSpec {
    pub match_variable: String,
    pub operator: Option<String>,
    pub match_values: Option<Vec<String>>,
    pub selector: Option<String>,
    pub negate_condition: Option<bool>,
    pub transforms: Option<Vec<String>>,
}

pub fn build_condition(spec: &ConditionSpec) -> Result<Condition, CdnError> {
    let variable: MatchVariable = spec.match_variable.parse()?;

    let operator = spec
        .operator
        .clone()
        .or_else(|| variable.default_operator().map(String::from));

    Ok(Condition {
        name: variable,
        parameters: ConditionParameters {
            type_name: variable.type_name().to_string(),
            operator,
            match_values: spec.match_values.clone(),
            negate_condition: spec.negate_condition,
            transforms: if variable.accepts_transforms() {
                spec.transforms.clone()
            } else {
                None
            },
            selector: if variable.accepts_selector() {
                spec.selector.clone()
            } else {
                None
            },
        },
    })
}

/// Rebuild conditions from their stored (camelCase) form
pub fn conditions_from_existing(existing: &[Value]) -> Result<Vec<Condition>, CdnError> {
    existing
        .iter()
        .map(|value| {
            let item = StoredItem::from_value(value)?;
            build_condition(&spec_from_stored(&item))
        })
        .collect()
}

fn spec_from_stored(item: &StoredItem) -> ConditionSpec {
    let mut spec = ConditionSpec {
        match_variable: item.name.clone(),
        operator: item.str("operator"),
        match_values: item.strings("matchValues"),
        selector: item.str("selector"),
        negate_condition: item.bool("negateCondition"),
        transforms: item.strings("transforms"),
    };

    // Rules written by older API versions carry UrlPath/UrlFileExtension
    // parameters in a different shape.
    if spec.operator.is_none() && spec.match_values.is_none() {
        match item.name.as_str() {
            "UrlPath" => {
                spec.operator = item.str("matchType");
                spec.match_values = item.strings("path");
            }
            "UrlFileExtension" => {
                spec.operator = Some("Any".to_string());
                spec.match_values = item.strings("extensions");
            }
            _ => {}
        }
    }

    spec
}
