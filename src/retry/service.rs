// ABOUTME: Provider service classes with their default attempt budgets.
// ABOUTME: Used by the per-service convenience wrappers on the retry controller.

use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceClass {
    Ec2,
    S3,
    Iam,
    #[serde(alias = "cfn")]
    CloudFormation,
    #[default]
    Generic,
}

impl ServiceClass {
    pub fn default_max_attempts(&self) -> u32 {
        match self {
            ServiceClass::Ec2 => 6,
            ServiceClass::S3 => 4,
            ServiceClass::Iam => 2,
            ServiceClass::CloudFormation => 3,
            ServiceClass::Generic => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceClass::Ec2 => "ec2",
            ServiceClass::S3 => "s3",
            ServiceClass::Iam => "iam",
            ServiceClass::CloudFormation => "cloudformation",
            ServiceClass::Generic => "generic",
        }
    }

    /// Operation name tagged with the service, e.g. `ec2:run-instances`.
    pub fn operation_name(&self, name: &str) -> String {
        format!("{}:{}", self.as_str(), name)
    }
}

impl fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
