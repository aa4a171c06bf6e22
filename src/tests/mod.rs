//! Cross-module tests for the command-line binary.
//!
//! Unit tests live next to the code they cover; these exercise the public
//! library API the way the binary wires it together.
