//! CLI definition using clap

use clap::{Args, Parser, Subcommand};

use crate::rules::{ActionArgs, ConditionSpec};

#[derive(Parser)]
#[command(name = "cdnctl")]
#[command(version)]
#[command(about = "Azure CDN / Front Door delivery rule management")]
#[command(long_about = r#"
cdnctl - Azure CDN / Front Door delivery rule management

Command groups:
  endpoint-rule     Delivery rules on a classic CDN endpoint
  afd-rule-set      Front Door rule sets
  afd-rule          Rules inside a Front Door rule set
  afd-origin-group  Front Door origin groups
  afd-origin        Front Door origins
  afd-route         Front Door routes
  origin-group      Classic CDN origin groups

Setup:
  Put AZURE_SUBSCRIPTION_ID and AZURE_ACCESS_TOKEN in your .env file,
  or set CDNCTL_STORE to edit a local JSON resource file offline.
"#)]
#[command(after_help = r#"
Examples:

  Add a caching rule to an endpoint:
    cdnctl endpoint-rule add -g rg --profile-name p --endpoint-name ep \
      --rule-name r1 --order 1 --match-variable RequestScheme --match-values HTTPS \
      --action-name CacheExpiration --cache-behavior Override --cache-duration 01:00:00

  Add a header condition to a Front Door rule:
    cdnctl afd-rule condition-add -g rg --profile-name p --rule-set-name rs \
      --rule-name r1 --match-variable RequestHeader --selector x-debug --operator Equal --match-values 1

  Remove the second action of a rule:
    cdnctl afd-rule action-remove -g rg --profile-name p --rule-set-name rs --rule-name r1 --index 1
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Machine output mode (JSON Lines)
    #[arg(long, global = true)]
    pub agent: bool,

    /// Print tool metadata
    #[arg(long)]
    pub manifest: bool,

    /// Verbose diagnostics on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subscription ID (defaults to AZURE_SUBSCRIPTION_ID)
    #[arg(long, global = true)]
    pub subscription: Option<String>,

    /// Return as soon as a long-running operation is accepted
    #[arg(long, global = true)]
    pub no_wait: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Delivery rules on a classic CDN endpoint
    EndpointRule(EndpointRuleCommand),

    /// Front Door rule sets
    AfdRuleSet(AfdRuleSetCommand),

    /// Rules inside a Front Door rule set
    AfdRule(AfdRuleCommand),

    /// Front Door origin groups
    AfdOriginGroup(AfdOriginGroupCommand),

    /// Front Door origins
    AfdOrigin(AfdOriginCommand),

    /// Front Door routes
    AfdRoute(AfdRouteCommand),

    /// Classic CDN origin groups
    OriginGroup(OriginGroupCommand),
}

// ============ Shared Arguments ============

#[derive(Args, Clone)]
pub struct ProfileArgs {
    /// Resource group name
    #[arg(short = 'g', long)]
    pub resource_group: String,

    /// Profile name
    #[arg(long)]
    pub profile_name: String,
}

#[derive(Args, Clone)]
pub struct EndpointArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Endpoint name
    #[arg(long)]
    pub endpoint_name: String,
}

#[derive(Args, Clone)]
pub struct RuleArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Rule set name
    #[arg(long)]
    pub rule_set_name: String,

    /// Rule name
    #[arg(long)]
    pub rule_name: String,
}

/// Condition settings other than the match variable
#[derive(Args, Clone, Default)]
pub struct ConditionFlags {
    /// Match operator, e.g. Equal, Contains, BeginsWith, Any
    #[arg(long)]
    pub operator: Option<String>,

    /// Values to match (comma separated)
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub match_values: Option<Vec<String>>,

    /// Header, cookie or post argument name
    #[arg(long)]
    pub selector: Option<String>,

    /// Invert the match
    #[arg(long)]
    pub negate_condition: Option<bool>,

    /// Transforms applied before matching (comma separated)
    #[arg(long = "transform", value_delimiter = ',', num_args = 1..)]
    pub transforms: Option<Vec<String>>,
}

impl ConditionFlags {
    pub fn to_spec(&self, match_variable: &str) -> ConditionSpec {
        ConditionSpec {
            match_variable: match_variable.to_string(),
            operator: self.operator.clone(),
            match_values: self.match_values.clone(),
            selector: self.selector.clone(),
            negate_condition: self.negate_condition,
            transforms: self.transforms.clone(),
        }
    }
}

#[derive(Args, Clone, Default)]
pub struct ActionFlags {
    /// Action kind, e.g. CacheExpiration, ModifyResponseHeader, UrlRedirect
    #[arg(long)]
    pub action_name: String,

    #[arg(long)]
    pub cache_behavior: Option<String>,

    /// Cache duration as [d.]hh:mm:ss
    #[arg(long)]
    pub cache_duration: Option<String>,

    /// Append, Overwrite or Delete
    #[arg(long)]
    pub header_action: Option<String>,

    #[arg(long)]
    pub header_name: Option<String>,

    #[arg(long)]
    pub header_value: Option<String>,

    #[arg(long)]
    pub query_string_behavior: Option<String>,

    #[arg(long)]
    pub query_parameters: Option<String>,

    #[arg(long)]
    pub redirect_type: Option<String>,

    #[arg(long)]
    pub redirect_protocol: Option<String>,

    #[arg(long)]
    pub custom_hostname: Option<String>,

    #[arg(long)]
    pub custom_path: Option<String>,

    #[arg(long)]
    pub custom_querystring: Option<String>,

    #[arg(long)]
    pub custom_fragment: Option<String>,

    #[arg(long)]
    pub source_pattern: Option<String>,

    #[arg(long)]
    pub destination: Option<String>,

    #[arg(long)]
    pub preserve_unmatched_path: Option<bool>,

    /// Origin group name or ID (OriginGroupOverride, RouteConfigurationOverride)
    #[arg(long)]
    pub origin_group: Option<String>,

    #[arg(long)]
    pub forwarding_protocol: Option<String>,

    #[arg(long)]
    pub query_string_caching_behavior: Option<String>,

    #[arg(long)]
    pub enable_caching: Option<bool>,

    #[arg(long)]
    pub enable_compression: Option<bool>,

    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub content_types_to_compress: Option<Vec<String>>,
}

impl From<&ActionFlags> for ActionArgs {
    fn from(flags: &ActionFlags) -> Self {
        ActionArgs {
            cache_behavior: flags.cache_behavior.clone(),
            cache_duration: flags.cache_duration.clone(),
            header_action: flags.header_action.clone(),
            header_name: flags.header_name.clone(),
            header_value: flags.header_value.clone(),
            query_string_behavior: flags.query_string_behavior.clone(),
            query_parameters: flags.query_parameters.clone(),
            redirect_type: flags.redirect_type.clone(),
            redirect_protocol: flags.redirect_protocol.clone(),
            custom_hostname: flags.custom_hostname.clone(),
            custom_path: flags.custom_path.clone(),
            custom_querystring: flags.custom_querystring.clone(),
            custom_fragment: flags.custom_fragment.clone(),
            source_pattern: flags.source_pattern.clone(),
            destination: flags.destination.clone(),
            preserve_unmatched_path: flags.preserve_unmatched_path,
            origin_group: flags.origin_group.clone(),
            forwarding_protocol: flags.forwarding_protocol.clone(),
            query_string_caching_behavior: flags.query_string_caching_behavior.clone(),
            enable_caching: flags.enable_caching,
            enable_compression: flags.enable_compression,
            content_types_to_compress: flags.content_types_to_compress.clone(),
        }
    }
}

// ============ Endpoint Rule Commands ============

#[derive(Args)]
pub struct EndpointRuleCommand {
    #[command(subcommand)]
    pub action: EndpointRuleAction,
}

#[derive(Subcommand)]
pub enum EndpointRuleAction {
    /// Add a delivery rule
    Add {
        #[command(flatten)]
        target: EndpointArgs,

        /// Rule name (optional only on partner SKUs)
        #[arg(long)]
        rule_name: Option<String>,

        /// Rule order
        #[arg(long, allow_negative_numbers = true)]
        order: i32,

        /// Match variable of the initial condition
        #[arg(long)]
        match_variable: Option<String>,

        #[command(flatten)]
        condition: ConditionFlags,

        #[command(flatten)]
        action: ActionFlags,
    },

    /// Remove a delivery rule by name or order
    Remove {
        #[command(flatten)]
        target: EndpointArgs,

        #[arg(long)]
        rule_name: Option<String>,

        #[arg(long, allow_negative_numbers = true)]
        order: Option<i32>,
    },

    /// Show the endpoint delivery policy
    Show {
        #[command(flatten)]
        target: EndpointArgs,
    },

    /// Append a condition to every rule with the given name
    ConditionAdd {
        #[command(flatten)]
        target: EndpointArgs,

        #[arg(long)]
        rule_name: String,

        #[arg(long)]
        match_variable: String,

        #[command(flatten)]
        condition: ConditionFlags,
    },

    /// Remove a condition by index
    ConditionRemove {
        #[command(flatten)]
        target: EndpointArgs,

        #[arg(long)]
        rule_name: String,

        #[arg(long)]
        index: usize,
    },

    /// Append an action to every rule with the given name
    ActionAdd {
        #[command(flatten)]
        target: EndpointArgs,

        #[arg(long)]
        rule_name: String,

        #[command(flatten)]
        action: ActionFlags,
    },

    /// Remove an action by index
    ActionRemove {
        #[command(flatten)]
        target: EndpointArgs,

        #[arg(long)]
        rule_name: String,

        #[arg(long)]
        index: usize,
    },
}

// ============ Front Door Rule Commands ============

#[derive(Args)]
pub struct AfdRuleCommand {
    #[command(subcommand)]
    pub action: AfdRuleAction,
}

#[derive(Subcommand)]
pub enum AfdRuleAction {
    /// Create a rule in a rule set
    Create {
        #[command(flatten)]
        target: RuleArgs,

        #[arg(long, allow_negative_numbers = true)]
        order: i32,

        /// Continue or Stop
        #[arg(long)]
        match_processing_behavior: Option<String>,

        #[arg(long)]
        match_variable: Option<String>,

        #[command(flatten)]
        condition: ConditionFlags,

        #[command(flatten)]
        action: ActionFlags,
    },

    /// Delete a rule
    Delete {
        #[command(flatten)]
        target: RuleArgs,
    },

    /// Show a rule
    Show {
        #[command(flatten)]
        target: RuleArgs,
    },

    /// Append a condition
    ConditionAdd {
        #[command(flatten)]
        target: RuleArgs,

        #[arg(long)]
        match_variable: String,

        #[command(flatten)]
        condition: ConditionFlags,
    },

    /// Remove a condition by index
    ConditionRemove {
        #[command(flatten)]
        target: RuleArgs,

        #[arg(long)]
        index: usize,
    },

    /// List the conditions of a rule
    ConditionList {
        #[command(flatten)]
        target: RuleArgs,
    },

    /// Append an action
    ActionAdd {
        #[command(flatten)]
        target: RuleArgs,

        #[command(flatten)]
        action: ActionFlags,
    },

    /// Remove an action by index
    ActionRemove {
        #[command(flatten)]
        target: RuleArgs,

        #[arg(long)]
        index: usize,
    },

    /// List the actions of a rule
    ActionList {
        #[command(flatten)]
        target: RuleArgs,
    },
}

// ============ Front Door Rule Set Commands ============

#[derive(Args)]
pub struct AfdRuleSetCommand {
    #[command(subcommand)]
    pub action: AfdRuleSetAction,
}

#[derive(Args, Clone)]
pub struct RuleSetTarget {
    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Rule set name
    #[arg(long)]
    pub rule_set_name: String,
}

#[derive(Subcommand)]
pub enum AfdRuleSetAction {
    /// Create an empty rule set
    Create {
        #[command(flatten)]
        target: RuleSetTarget,
    },

    /// Delete a rule set and its rules
    Delete {
        #[command(flatten)]
        target: RuleSetTarget,
    },

    /// Show a rule set
    Show {
        #[command(flatten)]
        target: RuleSetTarget,
    },
}

// ============ Front Door Origin Group Commands ============

#[derive(Args)]
pub struct AfdOriginGroupCommand {
    #[command(subcommand)]
    pub action: AfdOriginGroupAction,
}

#[derive(Args, Clone)]
pub struct AfdOriginGroupTarget {
    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Origin group name
    #[arg(long)]
    pub origin_group_name: String,
}

#[derive(Subcommand)]
pub enum AfdOriginGroupAction {
    /// Create an origin group
    Create {
        #[command(flatten)]
        target: AfdOriginGroupTarget,

        /// Samples considered for load balancing decisions
        #[arg(long)]
        sample_size: u32,

        /// Samples within the period that must succeed
        #[arg(long)]
        successful_samples_required: u32,

        /// Extra latency allowed over the fastest origin
        #[arg(long)]
        additional_latency_in_milliseconds: u32,

        /// GET, HEAD or NotSet
        #[arg(long)]
        probe_request_type: String,

        /// Http, Https or NotSet
        #[arg(long)]
        probe_protocol: String,

        #[arg(long)]
        probe_path: String,

        #[arg(long, default_value_t = 240)]
        probe_interval_in_seconds: u32,
    },

    /// Update an origin group; unspecified settings keep their current values
    Update {
        #[command(flatten)]
        target: AfdOriginGroupTarget,

        #[arg(long)]
        sample_size: Option<u32>,

        #[arg(long)]
        successful_samples_required: Option<u32>,

        #[arg(long)]
        additional_latency_in_milliseconds: Option<u32>,

        #[arg(long)]
        probe_request_type: Option<String>,

        #[arg(long)]
        probe_protocol: Option<String>,

        #[arg(long)]
        probe_path: Option<String>,

        #[arg(long)]
        probe_interval_in_seconds: Option<u32>,
    },
}

// ============ Front Door Origin Commands ============

#[derive(Args)]
pub struct AfdOriginCommand {
    #[command(subcommand)]
    pub action: AfdOriginAction,
}

#[derive(Args, Clone)]
pub struct OriginTarget {
    #[command(flatten)]
    pub profile: ProfileArgs,

    #[arg(long)]
    pub origin_group_name: String,

    #[arg(long)]
    pub origin_name: String,
}

#[derive(Args, Clone, Default)]
pub struct PrivateLinkFlags {
    #[arg(long)]
    pub enable_private_link: Option<bool>,

    /// Resource ID of the private link target
    #[arg(long)]
    pub private_link_resource: Option<String>,

    #[arg(long)]
    pub private_link_location: Option<String>,

    /// Sub-resource type (group ID) of the private link target
    #[arg(long)]
    pub private_link_sub_resource_type: Option<String>,

    #[arg(long)]
    pub private_link_request_message: Option<String>,
}

#[derive(Subcommand)]
pub enum AfdOriginAction {
    /// Create an origin
    Create {
        #[command(flatten)]
        target: OriginTarget,

        #[arg(long)]
        host_name: String,

        /// Enabled or Disabled
        #[arg(long, default_value = "Enabled")]
        enabled_state: String,

        #[arg(long, default_value_t = 80)]
        http_port: u16,

        #[arg(long, default_value_t = 443)]
        https_port: u16,

        #[arg(long)]
        origin_host_header: Option<String>,

        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        priority: i64,

        #[arg(long, default_value_t = 1000, allow_negative_numbers = true)]
        weight: i64,

        #[command(flatten)]
        private_link: PrivateLinkFlags,
    },

    /// Update an origin; unspecified settings keep their current values
    Update {
        #[command(flatten)]
        target: OriginTarget,

        #[arg(long)]
        host_name: Option<String>,

        #[arg(long)]
        enabled_state: Option<String>,

        #[arg(long)]
        http_port: Option<u16>,

        #[arg(long)]
        https_port: Option<u16>,

        #[arg(long)]
        origin_host_header: Option<String>,

        #[arg(long, allow_negative_numbers = true)]
        priority: Option<i64>,

        #[arg(long, allow_negative_numbers = true)]
        weight: Option<i64>,

        #[command(flatten)]
        private_link: PrivateLinkFlags,
    },
}

// ============ Front Door Route Commands ============

#[derive(Args)]
pub struct AfdRouteCommand {
    #[command(subcommand)]
    pub action: AfdRouteAction,
}

#[derive(Args, Clone)]
pub struct RouteTarget {
    #[command(flatten)]
    pub endpoint: EndpointArgs,

    #[arg(long)]
    pub route_name: String,
}

/// Route settings shared by create and update
#[derive(Args, Clone, Default)]
pub struct RouteFlags {
    /// Enabled or Disabled
    #[arg(long)]
    pub https_redirect: Option<String>,

    /// Http, Https (comma separated)
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub supported_protocols: Option<Vec<String>>,

    /// HttpOnly, HttpsOnly or MatchRequest
    #[arg(long)]
    pub forwarding_protocol: Option<String>,

    #[arg(long)]
    pub link_to_default_domain: Option<bool>,

    /// false sends no cache configuration at all
    #[arg(long)]
    pub enable_caching: Option<bool>,

    #[arg(long)]
    pub enable_compression: Option<bool>,

    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub content_types_to_compress: Option<Vec<String>>,

    /// IgnoreQueryString, UseQueryString, IgnoreSpecifiedQueryStrings or IncludeSpecifiedQueryStrings
    #[arg(long)]
    pub query_string_caching_behavior: Option<String>,

    /// Query parameters to include or exclude (comma separated)
    #[arg(long)]
    pub query_parameters: Option<String>,

    /// Custom domain names or IDs (comma separated)
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub custom_domains: Option<Vec<String>>,

    #[arg(long)]
    pub origin_path: Option<String>,

    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub patterns_to_match: Option<Vec<String>>,

    /// Rule set names or IDs (comma separated)
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub rule_sets: Option<Vec<String>>,
}

#[derive(Subcommand)]
pub enum AfdRouteAction {
    /// Create a route
    Create {
        #[command(flatten)]
        target: RouteTarget,

        /// Origin group name or ID
        #[arg(long)]
        origin_group: String,

        #[command(flatten)]
        route: RouteFlags,
    },

    /// Update a route; unspecified settings keep their current values
    Update {
        #[command(flatten)]
        target: RouteTarget,

        #[arg(long)]
        origin_group: Option<String>,

        #[command(flatten)]
        route: RouteFlags,
    },
}

// ============ Origin Group Commands ============

#[derive(Args)]
pub struct OriginGroupCommand {
    #[command(subcommand)]
    pub action: OriginGroupAction,
}

#[derive(Args, Clone)]
pub struct OriginGroupTarget {
    #[command(flatten)]
    pub endpoint: EndpointArgs,

    /// Origin group name
    #[arg(long)]
    pub name: String,
}

#[derive(Args, Clone, Default)]
pub struct ErrorDetectionFlags {
    /// Error types that mark an origin unhealthy, e.g. TcpErrorsOnly (comma separated)
    #[arg(long)]
    pub response_error_detection_error_types: Option<String>,

    #[arg(long)]
    pub response_error_detection_failover_threshold: Option<u32>,

    /// HTTP status ranges, e.g. 500-599,404
    #[arg(long)]
    pub response_error_detection_status_code_ranges: Option<String>,
}

#[derive(Subcommand)]
pub enum OriginGroupAction {
    /// Create an origin group
    Create {
        #[command(flatten)]
        target: OriginGroupTarget,

        #[arg(long)]
        probe_path: Option<String>,

        #[arg(long, default_value = "HEAD")]
        probe_method: String,

        #[arg(long, default_value = "HTTP")]
        probe_protocol: String,

        #[arg(long, default_value_t = 240)]
        probe_interval: u32,

        /// Origin names or IDs (comma separated)
        #[arg(long = "origins")]
        origins: Option<String>,

        #[command(flatten)]
        error_detection: ErrorDetectionFlags,
    },

    /// Update an origin group; an empty string clears a probe setting
    Update {
        #[command(flatten)]
        target: OriginGroupTarget,

        #[arg(long)]
        probe_path: Option<String>,

        #[arg(long)]
        probe_method: Option<String>,

        #[arg(long)]
        probe_protocol: Option<String>,

        /// Seconds; an empty string clears the interval
        #[arg(long)]
        probe_interval: Option<String>,

        #[arg(long = "origins")]
        origins: Option<String>,

        #[command(flatten)]
        error_detection: ErrorDetectionFlags,
    },
}
