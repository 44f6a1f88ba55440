pub mod decipher;
pub mod ising;
