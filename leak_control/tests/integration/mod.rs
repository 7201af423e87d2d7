mod support;

mod emergency_reset;
mod full_run;
mod operator_pause;
mod phase_faults;
mod pressure_faults;
mod safety_abort;
mod start_validation;
mod warning_policy;
mod watchdog;
