pub mod api;
pub mod oracle;
pub mod parser;

pub use api::{BatchPriceRequest, BatchPricesResponse, SuggestRequest, SuggestionsResponse};
pub use oracle::{BatchItem, OracleError, PriceOracleClient};
pub use parser::{
    parse_batch_prices, parse_single, parse_suggestions, strip_code_fences, ContractError,
    PricedLine, SuggestedItem,
};
