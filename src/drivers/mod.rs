pub mod a5050;
pub mod sonar;
