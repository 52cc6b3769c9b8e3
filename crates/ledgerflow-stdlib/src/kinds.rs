//! Step kind discriminators understood by the standard executor.

/// Generate a keypair and derive its lite accounts
pub const GENERATE_KEYS: &str = "GenerateKeys";

/// Fund an account from the network faucet
pub const FAUCET: &str = "Faucet";

/// Convert tokens into credits
pub const ADD_CREDITS: &str = "AddCredits";

/// Create an identity with its key book and page
pub const CREATE_IDENTITY: &str = "CreateIdentity";

/// Create a token account
pub const CREATE_TOKEN_ACCOUNT: &str = "CreateTokenAccount";

/// Send tokens to one or more recipients
pub const SEND_TOKENS: &str = "SendTokens";

/// Create a data account
pub const CREATE_DATA_ACCOUNT: &str = "CreateDataAccount";

/// Write entries to a data account
pub const WRITE_DATA: &str = "WriteData";

/// Query an account record
pub const QUERY: &str = "Query";
