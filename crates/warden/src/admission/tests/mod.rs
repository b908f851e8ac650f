mod common;
mod controller;
mod threshold;
