pub mod telnyx;
