

mod test_cookies;



mod test_request;


mod test_stream;

mod test_tcp;
