//! Transport implementations backed by real wire clients.

mod fastgpt;

pub use fastgpt::FastgptTransport;
