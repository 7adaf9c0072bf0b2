use serde::{Deserialize, Serialize};

/// Lower bounds (inclusive) for the customer value tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HniThresholds {
    pub ultra_hni: f64,
    pub hni:       f64,
}

/// Lower bounds (inclusive) for CASA deposit value bands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueBandThresholds {
    pub very_high: f64,
    pub high:      f64,
    pub medium:    f64,
}

/// How one deposit flag is inferred when the product mapping is silent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagRule {
    /// PROD_TYPE codes that imply the flag.
    pub type_codes: Vec<String>,
    /// Upper-case keywords searched in the product description.
    pub keywords:   Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositFlagRules {
    pub salary: FlagRule,
    pub wealth: FlagRule,
    pub senior: FlagRule,
    pub nri:    FlagRule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositConfig {
    pub casa_categories:      Vec<String>,
    pub term_categories:      Vec<String>,
    /// ACCT_STATUS codes (compared after id normalization) meaning dormant.
    pub dormant_status_codes: Vec<String>,
    pub value_bands:          ValueBandThresholds,
    pub flags:                DepositFlagRules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanConfig {
    pub staff_segment_codes: Vec<String>,
    /// IRAC codes that do not count as NPA for loans.
    pub standard_irac_codes: Vec<String>,
    /// Additional standard code tolerated on CC/OD accounts.
    pub ccod_extra_standard_irac: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub hni:                    HniThresholds,
    pub deposit:                DepositConfig,
    pub loan:                   LoanConfig,
    /// Strings that mean "no date" in date columns.
    pub date_sentinels:         Vec<String>,
    /// Rebuild the customer table after every deposit/loan/ccod/npa upload.
    pub auto_rebuild_customers: bool,
}

impl PipelineConfig {
    /// Load from a JSON file. Use PipelineConfig::default() for the built-in tables.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        Ok(config)
    }

    pub fn is_standard_loan_irac(&self, irac: &str) -> bool {
        self.loan.standard_irac_codes.iter().any(|c| c == irac)
    }

    pub fn is_standard_ccod_irac(&self, irac: &str) -> bool {
        self.is_standard_loan_irac(irac) || self.loan.ccod_extra_standard_irac == irac
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            hni: HniThresholds {
                ultra_hni: 10_000_000.0,
                hni:       2_500_000.0,
            },
            deposit: DepositConfig {
                casa_categories: strings(&[
                    "Regular Savings",
                    "Salary Savings",
                    "Senior Citizen Savings",
                    "NRI Savings",
                    "Wealth Savings",
                    "Basic Savings",
                    "Current Account",
                ]),
                term_categories: strings(&[
                    "Fixed Deposit",
                    "Recurring Deposit",
                    "Tax Saver FD",
                    "Senior Citizen FD",
                    "NRI Term Deposit",
                ]),
                dormant_status_codes: strings(&["8", "9"]),
                value_bands: ValueBandThresholds {
                    very_high: 10_000_000.0,
                    high:      250_000.0,
                    medium:    50_000.0,
                },
                flags: DepositFlagRules {
                    salary: FlagRule {
                        type_codes: strings(&["SAL"]),
                        keywords:   strings(&["SALARY"]),
                    },
                    wealth: FlagRule {
                        type_codes: strings(&["WLT"]),
                        keywords:   strings(&["WEALTH"]),
                    },
                    senior: FlagRule {
                        type_codes: strings(&["SRC"]),
                        keywords:   strings(&["SENIOR"]),
                    },
                    nri: FlagRule {
                        type_codes: strings(&["NRE", "NRO", "FCNR"]),
                        keywords:   strings(&["NRI", "NRE", "NRO"]),
                    },
                },
            },
            loan: LoanConfig {
                staff_segment_codes:      strings(&["STAFF", "STF"]),
                standard_irac_codes:      strings(&["0", "1", "2"]),
                ccod_extra_standard_irac: "3".into(),
            },
            date_sentinels: strings(&[
                "00/00/0000",
                "01/01/1900",
                "31/12/9999",
                "0",
                "NA",
                "N/A",
                "-",
            ]),
            auto_rebuild_customers: true,
        }
    }
}
