mod tracker_tests;
