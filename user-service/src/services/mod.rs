mod address_book;
mod cognito;
mod identity_provider;
mod user_directory;

pub use address_book::AddressBook;
pub use cognito::CognitoIdentityProvider;
pub use identity_provider::{
    IdentityProvider, IdentityProviderError, NewProviderUser, ProviderResult, ProviderUser,
    ProviderUserPage,
};
pub use user_directory::{UserDirectory, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, SUPER_ADMIN_GROUP};
