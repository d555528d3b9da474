pub mod outage_queries;
