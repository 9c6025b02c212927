// ABOUTME: Static table of known provider error codes.
// ABOUTME: Maps each code to its category, subtype, default retryability, and suggested action.

use super::Category;

/// One row of the provider error code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeEntry {
    pub code: &'static str,
    pub category: Category,
    pub subtype: &'static str,
    pub retryable: bool,
    pub suggested_action: &'static str,
}

const fn entry(
    code: &'static str,
    category: Category,
    subtype: &'static str,
    retryable: bool,
    suggested_action: &'static str,
) -> CodeEntry {
    CodeEntry {
        code,
        category,
        subtype,
        retryable,
        suggested_action,
    }
}

use Category::*;

pub static KNOWN_CODES: &[CodeEntry] = &[
    // Authentication and authorization
    entry("AccessDenied", Auth, "PERMISSION", false, "check IAM permissions for the calling principal"),
    entry("AccessDeniedException", Auth, "PERMISSION", false, "check IAM permissions for the calling principal"),
    entry("UnauthorizedOperation", Auth, "PERMISSION", false, "grant the missing action in the IAM policy"),
    entry("AuthFailure", Auth, "CREDENTIALS", false, "verify access key and secret key"),
    entry("InvalidClientTokenId", Auth, "CREDENTIALS", false, "verify access key id is valid and active"),
    entry("UnrecognizedClientException", Auth, "CREDENTIALS", false, "verify access key id is valid and active"),
    entry("SignatureDoesNotMatch", Auth, "CREDENTIALS", false, "verify secret key and system clock"),
    entry("ExpiredToken", Auth, "EXPIRED", false, "refresh session credentials"),
    entry("ExpiredTokenException", Auth, "EXPIRED", false, "refresh session credentials"),
    // Rate limiting
    entry("Throttling", Rate, "THROTTLE", true, "back off and retry with exponential delay"),
    entry("ThrottlingException", Rate, "THROTTLE", true, "back off and retry with exponential delay"),
    entry("RequestThrottled", Rate, "THROTTLE", true, "back off and retry with exponential delay"),
    entry("SlowDown", Rate, "THROTTLE", true, "reduce request rate against the bucket"),
    entry("RequestLimitExceeded", Rate, "LIMIT", true, "back off and reduce API call rate"),
    entry("TooManyRequestsException", Rate, "LIMIT", true, "back off and reduce API call rate"),
    entry("ProvisionedThroughputExceededException", Rate, "BURST", true, "wait for burst capacity to refill"),
    entry("BandwidthLimitExceeded", Rate, "BURST", true, "wait for burst capacity to refill"),
    // Capacity
    entry("InsufficientInstanceCapacity", Capacity, "INSTANCE", true, "retry later or choose another instance type or zone"),
    entry("InsufficientHostCapacity", Capacity, "HOST", true, "retry later or choose another zone"),
    entry("InsufficientCapacity", Capacity, "GENERAL", true, "retry later or choose another zone"),
    entry("SpotMaxPriceTooLow", Capacity, "SPOT", true, "raise the spot max price or fall back to on-demand"),
    entry("MaxSpotInstanceCountExceeded", Capacity, "SPOT", true, "reduce spot request count or fall back to on-demand"),
    // Service side
    entry("InternalError", Service, "INTERNAL", true, "retry; provider-side fault"),
    entry("InternalFailure", Service, "INTERNAL", true, "retry; provider-side fault"),
    entry("InternalServerError", Service, "INTERNAL", true, "retry; provider-side fault"),
    entry("ServiceUnavailable", Service, "UNAVAILABLE", true, "retry after the service recovers"),
    entry("ServiceUnavailableException", Service, "UNAVAILABLE", true, "retry after the service recovers"),
    entry("Unavailable", Service, "UNAVAILABLE", true, "retry after the service recovers"),
    // Network
    entry("RequestTimeout", Network, "TIMEOUT", true, "retry; check network latency to the endpoint"),
    entry("RequestTimeoutException", Network, "TIMEOUT", true, "retry; check network latency to the endpoint"),
    entry("EndpointConnectionError", Network, "CONNECTION", true, "check endpoint URL and network connectivity"),
    // Validation
    entry("ValidationError", Validation, "INPUT", false, "fix the request parameters"),
    entry("ValidationException", Validation, "INPUT", false, "fix the request parameters"),
    entry("InvalidParameterValue", Validation, "PARAMETER", false, "fix the offending parameter value"),
    entry("InvalidParameterCombination", Validation, "PARAMETER", false, "remove conflicting parameters"),
    entry("MissingParameter", Validation, "PARAMETER", false, "supply the required parameter"),
    entry("MalformedPolicyDocument", Validation, "INPUT", false, "fix the policy document syntax"),
    // Resources
    entry("ResourceNotFoundException", Resource, "NOT_FOUND", false, "verify the resource exists in this region"),
    entry("InvalidInstanceID.NotFound", Resource, "NOT_FOUND", false, "verify the instance id exists in this region"),
    entry("NoSuchBucket", Resource, "NOT_FOUND", false, "verify the bucket name"),
    entry("AlreadyExistsException", Resource, "CONFLICT", false, "use a different name or reuse the existing resource"),
    entry("BucketAlreadyExists", Resource, "CONFLICT", false, "choose a globally unique bucket name"),
    entry("ResourceInUseException", Resource, "CONFLICT", false, "wait for the resource to become free"),
    entry("DependencyViolation", Resource, "DEPENDENCY", false, "remove dependent resources first"),
    entry("LimitExceededException", Resource, "QUOTA", false, "delete unused resources or request a quota increase"),
    // Account
    entry("OptInRequired", Account, "OPT_IN", false, "opt in to the service for this account"),
    entry("PendingVerification", Account, "VERIFICATION", false, "wait for account verification to finish"),
    entry("Blocked", Account, "SUSPENDED", false, "contact provider support about the account"),
    entry("InstanceLimitExceeded", Account, "QUOTA", false, "request an instance limit increase"),
    entry("VcpuLimitExceeded", Account, "QUOTA", false, "request a vCPU limit increase"),
];

/// Look up a provider error code.
pub fn lookup(code: &str) -> Option<&'static CodeEntry> {
    KNOWN_CODES.iter().find(|e| e.code == code)
}
