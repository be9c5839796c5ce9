pub mod mock_gitlab;
