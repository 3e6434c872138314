//! Regulator chart-of-accounts codes read by the engine.

// Income statement (DRE)
pub const NET_REVENUE: &str = "3.01";
pub const EBIT: &str = "3.05";
pub const FINANCIAL_EXPENSE: &str = "3.07";
pub const PRE_TAX_INCOME: &str = "3.09";
pub const INCOME_TAXES: &str = "3.10";
pub const NET_INCOME: &str = "3.11";

// Balance sheet, assets (BPA)
pub const RECEIVABLES: &str = "1.01.03";
pub const INVENTORY: &str = "1.01.04";
pub const NON_CURRENT_ASSETS: &str = "1.02";
pub const FIXED_ASSETS: &str = "1.02.01";
pub const INTANGIBLE_ASSETS: &str = "1.02.03";
pub const TOTAL_ASSETS: &str = "1";

// Balance sheet, liabilities and equity (BPP)
pub const PAYABLES: &str = "2.01.02";
pub const SHORT_TERM_DEBT: &str = "2.01.04";
pub const LONG_TERM_DEBT: &str = "2.02.01";
pub const NON_CURRENT_LIABILITIES: &str = "2.02";
pub const EQUITY: &str = "2.03";
pub const TOTAL_LIABILITIES: &str = "2";

// Cash flow (DFC_MI)
pub const DEPRECIATION: &str = "6.01";
